use std::path::Path;
use std::process::Stdio;

use compio::process::Command;

use crate::config::Setting;

pub const OPTIONS_ENV: &str = "SCRIPTPIPE_OPTIONS";

/// Builds a shell invocation of `command`, with `file` as its last argument.
///
/// Options are handed over as JSON in [`OPTIONS_ENV`].
pub fn shell_command(command: &str, file: Option<&Path>, root: &Path, options: &Setting) -> Command {
    let (shell, mut args) = full_command(command);
    if let Some(file) = file {
        args.push(file.as_os_str().to_string_lossy().into_owned());
    }

    let mut cmd = Command::new(shell);
    cmd.args(args);
    cmd.current_dir(root);
    cmd.env(OPTIONS_ENV, options.to_json().to_string());
    let _ = cmd.stdin(Stdio::null());
    let _ = cmd.stdout(Stdio::piped());
    let _ = cmd.stderr(Stdio::piped());
    cmd
}

/// Shell and arguments for `command`. This is os-specific.
fn full_command(command: &str) -> (&'static str, Vec<String>) {
    #[cfg(target_family = "windows")]
    {
        ("cmd", vec!["/C".to_string(), command.to_string()])
    }
    #[cfg(target_family = "unix")]
    {
        (
            "sh",
            vec![
                "-c".to_string(),
                format!("{command} \"$@\""),
                "scriptpipe".to_string(),
            ],
        )
    }
}

/// Collapses stdout and stderr of a finished tool into one message.
pub fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    [stdout, stderr]
        .iter()
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_non_empty_streams() {
        assert_eq!(combined_output(b"out\n", b"  err \n"), "out\nerr");
        assert_eq!(combined_output(b"", b"err"), "err");
        assert_eq!(combined_output(b"", b""), "");
    }

    #[cfg(target_family = "unix")]
    #[test]
    fn passes_file_as_positional_argument() {
        let (shell, args) = full_command("jshint --verbose");
        assert_eq!(shell, "sh");
        assert_eq!(args[1], "jshint --verbose \"$@\"");
    }
}
