pub mod action_handlers;
pub mod invite_handlers;
pub mod member_handlers;
pub mod settings_handlers;
pub mod stats_handlers;
