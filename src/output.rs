// 出力ファイルのアトミック書き込み

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::PrepError;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 出力ディレクトリを作成する（既に存在する場合は何もしない）。
pub fn ensure_dir(dir: &Path) -> crate::error::Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        PrepError::output(format!("cannot create directory {}: {e}", dir.display()))
    })
}

/// バイト列を `path` にアトミックに書き込む。
///
/// 同じディレクトリ内の一時ファイルに書き込んでから rename するため、
/// 途中で失敗しても中途半端なファイルは残らない。
pub fn write_atomic(path: &Path, bytes: &[u8]) -> crate::error::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&dir)?;

    let tmp = tmp_path(&dir, path);
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(PrepError::output(format!(
            "failed to write {}: {e}",
            path.display()
        )));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(PrepError::output(format!(
            "failed to move output into place at {}: {e}",
            path.display()
        )));
    }
    Ok(())
}

// 並列ワーカー間で衝突しない一時ファイル名: .{name}.{pid}.{counter}.tmp
fn tmp_path(dir: &Path, path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(".{name}.{}.{n}.tmp", std::process::id()))
}
