pub mod add_layer;
pub mod health;
pub mod layers;
