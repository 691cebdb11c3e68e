pub mod deserializer;
pub mod message;
pub mod serializer;
pub mod status;

// Integers travel in the host's native byte order, both peers must share it

// Usernames and payloads are tiny, anything bigger is a broken peer
pub const MAX_FIELD_LEN: usize = 64 * 1024;
