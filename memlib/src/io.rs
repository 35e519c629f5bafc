use std::fs::File;
use std::io;
use std::ops::Deref;

/// Gets the contents of a trace file as one byte slice
pub fn get_trace_bytes(file: File) -> io::Result<impl Deref<Target = [u8]>> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::{BufReader, Read};
        const BUFFER_SIZE: usize = 40 * 4096;
        let mut buf = Vec::new();
        BufReader::with_capacity(BUFFER_SIZE, file).read_to_end(&mut buf)?;
        Ok(buf)
    }
    // Memory map the file on unix systems, the simulator only ever reads it front to back
    #[cfg(unix)]
    {
        use memmap2::{Advice, Mmap};
        // The file is opened read only and not modified while the map is alive
        let m = unsafe { Mmap::map(&file)? };
        m.advise(Advice::Sequential)?;
        Ok(m)
    }
}
