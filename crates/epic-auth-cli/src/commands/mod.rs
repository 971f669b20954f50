pub mod jwks;
pub mod keygen;
pub mod serve;
pub mod token;
