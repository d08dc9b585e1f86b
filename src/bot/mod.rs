/// Admin review of membership applications
pub mod approval;
/// Broadcast relay to the audience chats
pub mod broadcast;
/// Approved-member and pending-application registry
pub mod registry;
/// Update routing across menus, dialogs, and broadcasts
pub mod router;
/// Per-user dialog session store
pub mod sessions;
/// Roles, dialog positions, and event records
pub mod state;
/// Telegram transport adapter and update classification
pub mod telegram;
/// Keyboards, texts, and formatters
pub mod views;
