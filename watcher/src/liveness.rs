//! Liveness heartbeat (§6): touches (mtime-updates) a file every loop iteration, on both the
//! pre-genesis and post-genesis branches (P7).

use std::fs::OpenOptions;
use std::time::SystemTime;

pub fn touch(path: &str) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).write(true).open(path)?;
    file.set_modified(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_creates_file_if_absent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_owned();
        drop(file);
        touch(&path).unwrap();
        assert!(std::path::Path::new(&path).exists());
    }
}
