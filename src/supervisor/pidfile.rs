use std::path::Path;

/// Reads the pid file the supervisor itself wrote after the worker it
/// owns last started. A missing or unparsable file just means "nothing
/// to reclaim", not an error — a prior sandbox may have been torn down
/// before ever reaching `start`.
pub fn read_pid(path: &Path) -> Option<i32> {
    let contents = std::fs::read_to_string(path).ok()?;
    contents.trim().parse::<i32>().ok()
}

/// Writes the supervised child's pid as decimal text, overwriting any
/// previous contents. Called immediately after a successful spawn; the
/// supervisor owns this file end to end (see reclaim, which only ever
/// reads pids written here).
pub fn write_pid(path: &Path, pid: i32) -> std::io::Result<()> {
    std::fs::write(path, pid.to_string())
}
