pub(crate) mod listen;
pub(crate) mod transmit;
