use std::time::Instant;

/// Wall clock measurement around one pipeline phase.
///
/// The measurement is reported from `Drop`, so a phase that returns early
/// with an error still gets its timing logged.
pub(crate) struct ProfileScope {
    label: &'static str,
    started: Option<Instant>,
}

impl ProfileScope {
    pub(crate) fn enter(label: &'static str, enabled: bool) -> ProfileScope {
        let started = if enabled { Some(Instant::now()) } else { None };
        ProfileScope { label, started }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if let Some(started) = self.started {
            log::debug!("Profile {}: {:?}", self.label, started.elapsed());
        }
    }
}
