use std::io;
use std::process::{Command, Stdio};

/// Launch the platform's default browser on `url` without waiting for it.
///
/// The child's stdio is detached: stdout of this process carries the
/// JSON-RPC stream.
pub fn open(url: &str) -> io::Result<()> {
    let (program, args): (&str, &[&str]) = if cfg!(target_os = "windows") {
        ("cmd", &["/c", "start", ""])
    } else if cfg!(target_os = "macos") {
        ("open", &[])
    } else {
        ("xdg-open", &[])
    };

    Command::new(program)
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_child| ())
}
