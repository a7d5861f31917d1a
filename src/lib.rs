pub mod cosyne;
