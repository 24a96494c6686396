//! The passes a composited frame is made of, and the order they run in.

use thiserror::Error;

/// Textures the passes exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneTarget {
    OffscreenColor,
    OffscreenDepth,
    Swapchain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenePass {
    /// Skybox and geometry into the offscreen color and depth targets.
    World,
    /// Full-screen quad with the depth outline into the swapchain image.
    Screen,
}

impl ScenePass {
    pub const ALL: [ScenePass; 2] = [ScenePass::World, ScenePass::Screen];

    pub fn label(self) -> &'static str {
        match self {
            ScenePass::World => "World Pass",
            ScenePass::Screen => "Screen Pass",
        }
    }

    pub fn reads(self) -> &'static [SceneTarget] {
        match self {
            ScenePass::World => &[],
            ScenePass::Screen => &[SceneTarget::OffscreenColor, SceneTarget::OffscreenDepth],
        }
    }

    pub fn writes(self) -> &'static [SceneTarget] {
        match self {
            ScenePass::World => &[SceneTarget::OffscreenColor, SceneTarget::OffscreenDepth],
            ScenePass::Screen => &[SceneTarget::Swapchain],
        }
    }
}

/// Order the passes are encoded in every frame.
pub const PASS_ORDER: [ScenePass; 2] = [ScenePass::World, ScenePass::Screen];

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PassOrderError {
    #[error("{pass:?} reads {target:?} before any pass writes it")]
    UnwrittenRead { pass: ScenePass, target: SceneTarget },
    #[error("{0:?} is scheduled more than once")]
    Duplicate(ScenePass),
    #[error("{0:?} is never scheduled")]
    Missing(ScenePass),
}

/// Checks that every pass runs exactly once and only reads targets an
/// earlier pass has written.
pub fn check_order(order: &[ScenePass]) -> Result<(), PassOrderError> {
    for pass in ScenePass::ALL {
        match order.iter().filter(|p| **p == pass).count() {
            0 => return Err(PassOrderError::Missing(pass)),
            1 => {}
            _ => return Err(PassOrderError::Duplicate(pass)),
        }
    }

    let mut written: Vec<SceneTarget> = Vec::new();
    for &pass in order {
        if let Some(&target) = pass.reads().iter().find(|t| !written.contains(t)) {
            return Err(PassOrderError::UnwrittenRead { pass, target });
        }
        written.extend_from_slice(pass.writes());
    }
    Ok(())
}
