pub mod leb128;
