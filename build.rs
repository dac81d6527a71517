fn main() {
    // 只有在设备构建时才需要ESP-IDF的链接参数
    if std::env::var_os("CARGO_FEATURE_ESP").is_some() {
        embuild::espidf::sysenv::output();
    }
}
