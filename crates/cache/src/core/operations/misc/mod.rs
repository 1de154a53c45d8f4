mod clear;
mod stats;
