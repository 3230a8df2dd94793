//! Example mod: greets on load and turns scroll input into camera zoom.

use ember_mod_api::{GameMod, HostApi, ModError, ModStr};

pub const MOD_NAME: &str = "cpp_hell";
pub const GREETING: &str = "Hello from hell";

#[derive(Debug, Default)]
pub struct HellMod;

impl HellMod {
    pub fn new() -> Self {
        Self
    }
}

impl GameMod for HellMod {
    fn name(&self) -> &str {
        MOD_NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, host: &mut dyn HostApi) -> Result<(), ModError> {
        host.info(ModStr::new(MOD_NAME), ModStr::new(GREETING));
        Ok(())
    }

    fn scroll(&mut self, host: &mut dyn HostApi, amount: f32) -> Result<(), ModError> {
        host.set_zoom(host.get_zoom() + amount);
        Ok(())
    }
}

ember_mod_api::create_mod!(HellMod);
