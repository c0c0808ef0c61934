//! Heuristic mount-point search over the host's rendered UI surface.
//!
//! The host offers no contractual API, so the surface is consulted as a
//! read-only oracle: a snapshot of candidate containers with just enough
//! structure to test the four heuristics. Lookup is best-effort; callers
//! retry on the configured attempt ladder and treat "not found" as a
//! degraded, non-fatal state.

use crate::config::LocatorConfig;
use crate::render::RowView;
use std::sync::Arc;

/// Snapshot of one candidate container in the host UI.
#[derive(Debug, Clone)]
pub struct ContainerProbe {
    pub id: u64,
    /// Vertical overflow enabled.
    pub scrollable_y: bool,
    /// Laid-out width in px.
    pub width: u32,
    /// Number of structural children.
    pub child_count: usize,
    /// Declared height of the first child in px (virtualized lists declare
    /// the full list height here).
    pub child_height: u32,
    /// Concatenated visible text of the subtree.
    pub text: String,
}

/// Read-only oracle over the host UI plus its client-side router.
pub trait HostSurface: Send + Sync {
    /// Snapshot of the currently rendered candidate containers.
    fn candidates(&self) -> Vec<ContainerProbe>;
    /// Resolve a probe id to a live mount handle; `None` when the host has
    /// re-rendered the container away since the snapshot.
    fn mount(&self, id: u64) -> Option<Arc<dyn MountPoint>>;
    /// Navigate through the host's own routing convention.
    fn navigate(&self, route: &str);
}

/// Handle to the container hosting the replacement list.
pub trait MountPoint: Send + Sync {
    /// Hide the host's own rows. The host may repaint them visible at any
    /// time, so this is called again on every render pass.
    fn suppress_native(&self);
    /// Replace all overlay rows, in order.
    fn set_rows(&self, rows: &[RowView]);
    /// Move the active-row highlight without rebuilding rows.
    fn set_active(&self, chat_id: Option<&str>);
}

/// Find the scroll container that hosts the conversation list. All four
/// heuristics must hold: vertical scrollability, a width inside the
/// navigation-rail band, a single tall child (evidence of a virtualized
/// list), and text overlapping at least two known conversation names.
pub fn locate(
    surface: &dyn HostSurface,
    known_names: &[String],
    config: &LocatorConfig,
) -> Option<u64> {
    surface
        .candidates()
        .into_iter()
        .find(|probe| qualifies(probe, known_names, config))
        .map(|probe| probe.id)
}

fn qualifies(probe: &ContainerProbe, known_names: &[String], config: &LocatorConfig) -> bool {
    if !probe.scrollable_y {
        return false;
    }
    if probe.width < config.rail_min_width || probe.width > config.rail_max_width {
        return false;
    }
    if probe.child_count != 1 || probe.child_height < config.min_list_height {
        return false;
    }
    // Two *distinct* names must overlap; duplicate entries don't count twice.
    let mut first_match: Option<&str> = None;
    for name in known_names {
        if name.is_empty() || !probe.text.contains(name.as_str()) {
            continue;
        }
        match first_match {
            None => first_match = Some(name),
            Some(seen) if seen != name => return true,
            Some(_) => {}
        }
    }
    false
}
