use std::io;
use std::mem;
use std::os::raw::c_schar;
use std::os::unix::io::{AsRawFd, RawFd};

use libc::{c_char, c_int, c_short, c_uint, c_ulong};

use crate::Error;

const ASYNC_LOW_LATENCY: c_int = 1 << 13;
const TIOCSSERIAL: c_ulong = 0x541F;

/// `struct serial_struct` from `linux/serial.h`.
#[repr(C)]
struct SerialInfo {
    typ: c_int,
    line: c_int,
    port: c_uint,
    irq: c_int,
    flags: c_int,
    xmit_fifo_size: c_int,
    custom_divisor: c_int,
    baud_rate: c_int,
    close_delay: c_short,
    io_type: c_schar,
    reserved_char: c_schar,
    hub6: c_int,
    closing_wait: c_short,
    closing_wait2: c_short,
    iomem_base: *mut c_char,
    iomem_reg_shift: c_short,
    port_high: c_int,
    iomap_base: c_ulong,
}

impl SerialInfo {
    fn read(fd: RawFd) -> io::Result<Self> {
        unsafe {
            let mut ret: SerialInfo = mem::zeroed();
            if libc::ioctl(fd, libc::TIOCGSERIAL, &mut ret as *mut SerialInfo) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(ret)
        }
    }

    fn write(&mut self, fd: RawFd) -> io::Result<()> {
        unsafe {
            if libc::ioctl(fd, TIOCSSERIAL, self as *mut SerialInfo) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

/// Ask the tty driver to push received bytes immediately instead of batching them.
///
/// Returns `false` if the flag was already set and nothing had to be written.
pub(crate) fn apply_low_latency<T: AsRawFd>(serial: &T) -> crate::Result<bool> {
    let fd = serial.as_raw_fd();
    let mut info = SerialInfo::read(fd).map_err(Error::transport)?;
    if info.flags & ASYNC_LOW_LATENCY != 0 {
        return Ok(false);
    }
    info.flags |= ASYNC_LOW_LATENCY;
    info.write(fd).map_err(Error::transport)?;
    Ok(true)
}
