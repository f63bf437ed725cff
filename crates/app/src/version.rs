use std::fmt;

/// Build metadata captured by `build.rs`
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub package_version: &'static str,
    pub repo_version: &'static str,
    pub build_profile: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
    pub target: &'static str,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        package_version: env!("CARGO_PKG_VERSION"),
        repo_version: env!("REPO_VERSION"),
        build_profile: env!("BUILD_PROFILE"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        rust_version: env!("RUST_VERSION"),
        target: env!("BUILD_TARGET"),
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "envie {} ({})", self.package_version, self.repo_version)?;
        writeln!(f, "  profile:   {}", self.build_profile)?;
        writeln!(f, "  built:     {}", self.build_timestamp)?;
        writeln!(f, "  rustc:     {}", self.rust_version)?;
        write!(f, "  target:    {}", self.target)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_leads_with_package_version() {
        let rendered = build_info().to_string();
        assert!(rendered.starts_with(&format!("envie {}", env!("CARGO_PKG_VERSION"))));
        assert_eq!(rendered.lines().count(), 5);
    }
}
