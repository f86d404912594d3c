pub mod constants;
pub mod convgru;
pub mod convlstm;
pub mod error;
pub mod recurrent;
pub mod util {
    pub mod stack_config;
    pub mod weight_init;
}

pub use error::{ConvRecurrentError, Result};
