pub mod certificate;
pub mod recipients;
