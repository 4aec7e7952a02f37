mod completed_sessions;
mod kv;
