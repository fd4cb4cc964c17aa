/// Rectifier that lets a `slope` fraction of negative inputs through.
#[derive(Clone, Debug)]
pub struct LeakyRelu {
    slope: f32,
}

impl LeakyRelu {
    pub fn new(slope: f32) -> Self {
        Self { slope }
    }

    pub fn slope(&self) -> f32 {
        self.slope
    }

    pub fn f(&self, z: f32) -> f32 {
        if z >= 0. { z } else { self.slope * z }
    }

    pub fn df(&self, z: f32) -> f32 {
        if z >= 0. { 1. } else { self.slope }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_inputs_are_scaled() {
        let act = LeakyRelu::new(0.2);
        assert_eq!(act.f(3.0), 3.0);
        assert!((act.f(-1.0) + 0.2).abs() < 1e-7);
        assert_eq!(act.df(-5.0), 0.2);
        assert_eq!(act.df(0.5), 1.0);
    }
}
