fn main() {
    sable::uci::run_uci_loop();
}
