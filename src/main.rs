fn main() {
    slidedeck::run()
}
