pub mod markup;
pub mod ocr;
pub mod transport;

pub use markup::{EndpointDiscoverer, RegexDiscoverer};
pub use ocr::{CaptchaRecognizer, CharsetFilter, CommandRecognizer, UnconfiguredRecognizer};
pub use transport::{HttpResponse, HttpSession, Transport};
