use crate::config::FluidPreset;

/// Material preset for quick configuration of fluid behavior.
///
/// Only the material-dependent coefficients are stored; geometry (smoothing
/// radius, particle size) stays with the preset it is applied to.
#[derive(Clone, Copy, Debug)]
pub struct MaterialPreset {
    pub viscosity: f32,
    pub adhesion_strength: f32,
    pub cohesion_strength: f32,
    pub stack_pressure_scale: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl MaterialPreset {
    /// Water: low viscosity, barely sticks, bounces a little.
    pub const WATER: Self = Self {
        viscosity: 0.02,
        adhesion_strength: 2_000.0,
        cohesion_strength: 50.0,
        stack_pressure_scale: 0.5,
        friction: 0.05,
        restitution: 0.3,
    };

    /// Honey: thick, sticky, slides slowly.
    pub const HONEY: Self = Self {
        viscosity: 0.6,
        adhesion_strength: 40_000.0,
        cohesion_strength: 400.0,
        stack_pressure_scale: 0.1,
        friction: 0.6,
        restitution: 0.0,
    };

    /// Slime: strong cohesion, clings to surfaces and drips in strands.
    pub const SLIME: Self = Self {
        viscosity: 0.35,
        adhesion_strength: 25_000.0,
        cohesion_strength: 800.0,
        stack_pressure_scale: 1.0,
        friction: 0.4,
        restitution: 0.05,
    };

    /// Blood: slightly viscous, moderately sticky, drips fast when stacked.
    pub const BLOOD: Self = Self {
        viscosity: 0.1,
        adhesion_strength: 8_000.0,
        cohesion_strength: 120.0,
        stack_pressure_scale: 2.0,
        friction: 0.2,
        restitution: 0.1,
    };

    /// Apply this material onto a fluid preset.
    pub fn apply_to(&self, preset: &mut FluidPreset) {
        preset.viscosity = self.viscosity;
        preset.adhesion_strength = self.adhesion_strength;
        preset.cohesion_strength = self.cohesion_strength;
        preset.stack_pressure_scale = self.stack_pressure_scale;
        preset.friction = self.friction;
        preset.restitution = self.restitution;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_presets_valid() {
        for (name, material) in [
            ("water", MaterialPreset::WATER),
            ("honey", MaterialPreset::HONEY),
            ("slime", MaterialPreset::SLIME),
            ("blood", MaterialPreset::BLOOD),
        ] {
            let mut preset = FluidPreset::default();
            material.apply_to(&mut preset);
            assert!(preset.validate().is_ok(), "{} yields an invalid preset", name);
        }
    }

    #[test]
    fn test_apply_material_preset() {
        let mut preset = FluidPreset::default();
        MaterialPreset::HONEY.apply_to(&mut preset);
        assert_eq!(preset.viscosity, 0.6);
        assert_eq!(preset.restitution, 0.0);
    }
}
