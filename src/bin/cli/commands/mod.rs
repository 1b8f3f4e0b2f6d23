pub mod flashcards;
pub mod material;
pub mod speak;
pub mod study;
pub mod subjects;
