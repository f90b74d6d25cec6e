mod chunking;
mod decoder;
mod detection;
mod discovery;
mod encoder;
mod leaf;
