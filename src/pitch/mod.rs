pub mod autocorr;
