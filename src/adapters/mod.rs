// Adapters layer: concrete implementations for external systems (OCR engine, HTTP).

pub mod http;
pub mod ocr;
