use rand::rngs::StdRng;
use rand::SeedableRng;

/// Runtime-wide settings, fixed when the machine is built. `verbose`,
/// `debug_exec` and `pretty` may be toggled afterwards; the random source is reseeded
/// only through [`crate::Runtime::rng`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub verbose: bool,
    /// Trace every executed instruction.
    pub debug_exec: bool,
    /// Render results with line breaks when they outgrow the line.
    pub pretty: bool,
    pub sandboxed: bool,
    /// Seed for the random source; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub max_call_depth: usize,
    /// Limit on natives re-entering the machine (`apply`, `map`, `eval`),
    /// each of which runs on the host stack.
    pub max_reentry_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            verbose: false,
            debug_exec: false,
            pretty: false,
            sandboxed: false,
            seed: None,
            max_call_depth: 10_000,
            max_reentry_depth: 256,
        }
    }
}

impl RuntimeConfig {
    pub fn sandboxed() -> Self {
        RuntimeConfig {
            sandboxed: true,
            ..Self::default()
        }
    }

    pub fn new_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn seeded_rng_is_deterministic() {
        let cfg = RuntimeConfig {
            seed: Some(7),
            ..RuntimeConfig::default()
        };
        let a: u64 = cfg.new_rng().gen();
        let b: u64 = cfg.new_rng().gen();
        assert_eq!(a, b);
    }

    #[test]
    fn sandboxed_preset() {
        let cfg = RuntimeConfig::sandboxed();
        assert!(cfg.sandboxed);
        assert!(!cfg.debug_exec);
    }
}
