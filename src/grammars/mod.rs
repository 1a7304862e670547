pub mod mcfg;
