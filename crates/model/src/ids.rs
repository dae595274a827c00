//! Well-known USB vendor and product ids

/// FreeWili USB hub (Microchip USB2513)
pub const USB_VID_FW_HUB: u16 = 0x0424;
pub const USB_PID_FW_HUB: u16 = 0x2513;

/// FreeWili FTDI bridge to the FPGA
pub const USB_VID_FW_FTDI: u16 = 0x0403;
pub const USB_PID_FW_FTDI: u16 = 0x6014;

/// Raspberry Pi
pub const USB_VID_RPI: u16 = 0x2E8A;
/// Pico SDK CDC UART
pub const USB_PID_RPI_CDC: u16 = 0x000A;
/// RP2040 UF2 bootloader
pub const USB_PID_RPI_2040_UF2: u16 = 0x0003;
/// RP2350 UF2 bootloader
pub const USB_PID_RPI_2350_UF2: u16 = 0x000F;

/// Espressif
pub const USB_VID_ESPRESSIF: u16 = 0x303A;
/// ESP32-S3/C3 built-in USB Serial/JTAG
pub const USB_PID_ESP32_SERIAL_JTAG: u16 = 0x1001;
/// ESP32-S2/S3 TinyUSB CDC
pub const USB_PID_ESP32_CDC: u16 = 0x1002;
