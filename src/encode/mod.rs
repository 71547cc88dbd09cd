pub mod image_bytes;
