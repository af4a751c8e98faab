//! Command-level tests

mod test_chats;
mod test_list_chats;
