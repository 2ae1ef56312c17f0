//! External service integrations.

pub mod ad_library {
    pub use crate::ad_library::*;
}

pub mod ad_interpreter {
    pub use crate::ad_interpreter::*;
}

pub mod registry {
    pub use crate::registry::*;
}

pub mod verifier {
    pub use crate::verifier::*;
}
