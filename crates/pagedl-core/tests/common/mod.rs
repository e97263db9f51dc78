pub mod scripted_host;
