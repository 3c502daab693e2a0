pub mod wake_pipe;
