pub mod key_pair;
