mod save_load;
#[cfg(feature = "supabase")]
mod supabase;
