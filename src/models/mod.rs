mod activation;
mod brand;
mod license;
mod license_key;
mod product;

pub use activation::*;
pub use brand::*;
pub use license::*;
pub use license_key::*;
pub use product::*;
