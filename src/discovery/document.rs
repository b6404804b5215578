use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use super::group::TargetGroup;

/// Serialize groups as a Prometheus `file_sd` document, one tab per indent
/// level.
pub fn encode(groups: &[TargetGroup]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::with_capacity(256 * groups.len().max(1));
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));

    groups.serialize(&mut serializer)?;
    buf.push(b'\n');

    Ok(buf)
}

pub fn decode(data: &[u8]) -> Result<Vec<TargetGroup>, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Replace the document at `path`. The content goes to a temporary file in the
/// same directory first, which is renamed over `path` once complete.
pub fn write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    file.persist(path).map_err(|err| err.error)?;

    Ok(())
}
