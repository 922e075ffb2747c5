#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use pixmill_image as image;

#[doc(inline)]
pub use pixmill_imgproc as imgproc;

#[doc(inline)]
pub use pixmill_io as io;

#[doc(inline)]
pub use pixmill_pipeline as pipeline;
