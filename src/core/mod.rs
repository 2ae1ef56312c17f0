// Domain-layer modules and shared errors
pub mod scoring {
    pub use crate::scoring::*;
}

pub mod qualification {
    pub use crate::qualification::*;
}

pub mod services {
    pub use crate::services::*;
}

pub mod verification {
    pub use crate::verification::*;
}

pub mod errors {
    pub use crate::errors::*;
}
