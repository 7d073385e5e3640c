fn main() {
    agsync::app::cli::run();
}
