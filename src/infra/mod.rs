pub mod console_gate;
pub mod csv_export;
pub mod fs_checkpoint;
pub mod places_client;
pub mod supabase;
