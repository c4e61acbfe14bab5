pub mod swaps;
