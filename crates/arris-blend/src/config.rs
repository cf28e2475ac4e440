//! Blend configuration.
//!
//! One explicit config object passed into every entry point; there is no
//! global or environment-derived state anywhere in the engine.

/// Which side of the dihedral the feature works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideMode {
    /// Toward the dihedral interior: the feature removes material.
    #[default]
    Inset,
    /// Away from the interior: the feature adds material.
    Outset,
}

/// How the tube builder produces the fillet tool solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TubeStrategy {
    /// Fast ring extrusion, falling back to sphere hulls when the path
    /// folds onto itself.
    #[default]
    Auto,
    /// Always use ring extrusion.
    FastRings,
    /// Always use the slow sphere-hull sweep.
    SphereHulls,
}

/// Configuration for one fillet/chamfer invocation.
#[derive(Debug, Clone)]
pub struct BlendConfig {
    /// Feature side (inset removes material, outset adds).
    pub side: SideMode,
    /// Uniform tool oversizing applied before boolean combination, as a
    /// fraction of the feature size. Zero disables inflation.
    pub inflate: f64,
    /// Radial segment count for tube rings and sphere hulls.
    pub segments: u32,
    /// Tube construction strategy.
    pub strategy: TubeStrategy,
    /// Extra solver passes that re-estimate local normals at tangency
    /// points (for curved faces).
    pub refine_passes: u32,
    /// Escalating-tolerance repair attempts before a boolean gives up.
    pub max_boolean_attempts: u32,
    /// Emit per-stage diagnostics through the `log` facade.
    pub debug: bool,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            side: SideMode::Inset,
            inflate: 0.0,
            segments: 16,
            strategy: TubeStrategy::Auto,
            refine_passes: 2,
            max_boolean_attempts: 3,
            debug: false,
        }
    }
}
