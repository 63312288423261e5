/// Retrieves the platform string in the format `ARCH-Os`.
pub fn platform() -> String {
    format!(
        "{}-{}{}",
        std::env::consts::ARCH,
        &std::env::consts::OS[..1].to_uppercase(),
        &std::env::consts::OS[1..]
    )
}

/// Whether the running OS can execute self-extracting AppImages.
pub fn is_supported_os() -> bool {
    std::env::consts::OS == "linux"
}
