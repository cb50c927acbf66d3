pub fn setup() {
    // Colored, full backtraces only when debugging.
    #[cfg(debug_assertions)]
    {
        color_backtrace::install();
    }
}
