//! Dry-run transcripts for common test scenarios.
//!
//! Transcripts are trimmed versions of what `ndk-build -n` prints: the
//! `mkdir`, `echo`, `install` and `strip` noise is kept so that filtering is
//! exercised too.

use std::path::{Path, PathBuf};

pub const NDK_CLANG: &str = "/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang";
pub const NDK_CLANGXX: &str = "/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang++";

/// Build command of the fixtures.
pub fn build_command() -> Vec<String> {
    vec!["ndk-build".to_string(), "NDK_DEBUG=1".to_string()]
}

/// Clean command of the fixtures.
pub fn clean_command() -> Vec<String> {
    vec![
        "ndk-build".to_string(),
        "NDK_DEBUG=1".to_string(),
        "clean".to_string(),
    ]
}

/// Two sources compiled by one compiler and linked into one library.
pub const SINGLE_CLANG_LIBRARY: &str = "\
clang -c a.c -o a.o
clang -c b.cpp -o b.o
clang -o out/toolchain-x86/x86/libfoo.so a.o b.o
";

/// `hello-jni` linking a static `util` module, built for two ABIs.
///
/// Per ABI the compile order is `util.c`, `hello-jni.c`, `native.cpp`,
/// `atomic.S`.
pub const NDK_BUILD_TWO_ABIS: &str = r#"rm -f ./libs/arm64-v8a/lib*.so ./libs/x86/lib*.so
rm -f ./libs/arm64-v8a/gdbserver ./libs/arm64-v8a/gdb.setup
mkdir -p obj/local/arm64-v8a/objs-debug/util
echo [arm64-v8a] "Compile        ": "util <= util.c"
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang -MMD -MP -MF obj/local/arm64-v8a/objs-debug/util/util.o.d -target aarch64-none-linux-android21 -fpic -O0 -Ijni -c  jni/util.c -o obj/local/arm64-v8a/objs-debug/util/util.o
echo [arm64-v8a] "StaticLibrary  ": "libutil.a"
rm -f obj/local/arm64-v8a/libutil.a
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/llvm-ar crsD obj/local/arm64-v8a/libutil.a obj/local/arm64-v8a/objs-debug/util/util.o
mkdir -p obj/local/arm64-v8a/objs-debug/hello-jni
echo [arm64-v8a] "Compile        ": "hello-jni <= hello-jni.c"
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang -MMD -MP -MF obj/local/arm64-v8a/objs-debug/hello-jni/hello-jni.o.d -target aarch64-none-linux-android21 -fpic -O0 -Ijni -DMSG="\"hello world\"" -DNDEBUG -c  jni/hello-jni.c -o obj/local/arm64-v8a/objs-debug/hello-jni/hello-jni.o
echo [arm64-v8a] "Compile++      ": "hello-jni <= native.cpp"
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang++ -MMD -MP -MF obj/local/arm64-v8a/objs-debug/hello-jni/native.o.d -target aarch64-none-linux-android21 -fpic -O0 -Ijni -std=c++17 -fno-exceptions -c  jni/native.cpp -o obj/local/arm64-v8a/objs-debug/hello-jni/native.o
echo [arm64-v8a] "Compile        ": "hello-jni <= atomic.S"
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang -MMD -MP -MF obj/local/arm64-v8a/objs-debug/hello-jni/atomic.o.d -target aarch64-none-linux-android21 -fpic -Ijni -c  jni/atomic.S -o obj/local/arm64-v8a/objs-debug/hello-jni/atomic.o
echo [arm64-v8a] "SharedLibrary  ": "libhello-jni.so"
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang++ -Wl,-soname,libhello-jni.so -shared obj/local/arm64-v8a/objs-debug/hello-jni/hello-jni.o obj/local/arm64-v8a/objs-debug/hello-jni/native.o obj/local/arm64-v8a/objs-debug/hello-jni/atomic.o obj/local/arm64-v8a/libutil.a -lgcc -target aarch64-none-linux-android21 -no-canonical-prefixes -Wl,--no-undefined -llog -lc -lm -o obj/local/arm64-v8a/libhello-jni.so
echo [arm64-v8a] "Install        ": "libhello-jni.so => libs/arm64-v8a/libhello-jni.so"
install -p obj/local/arm64-v8a/libhello-jni.so ./libs/arm64-v8a/libhello-jni.so
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/llvm-strip --strip-unneeded  ./libs/arm64-v8a/libhello-jni.so
mkdir -p obj/local/x86/objs-debug/util
echo [x86] "Compile        ": "util <= util.c"
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang -MMD -MP -MF obj/local/x86/objs-debug/util/util.o.d -target i686-none-linux-android16 -fpic -O0 -Ijni -c  jni/util.c -o obj/local/x86/objs-debug/util/util.o
echo [x86] "StaticLibrary  ": "libutil.a"
rm -f obj/local/x86/libutil.a
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/llvm-ar crsD obj/local/x86/libutil.a obj/local/x86/objs-debug/util/util.o
mkdir -p obj/local/x86/objs-debug/hello-jni
echo [x86] "Compile        ": "hello-jni <= hello-jni.c"
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang -MMD -MP -MF obj/local/x86/objs-debug/hello-jni/hello-jni.o.d -target i686-none-linux-android16 -fpic -O2 -Ijni -DMSG="\"hello world\"" -DNDEBUG -c  jni/hello-jni.c -o obj/local/x86/objs-debug/hello-jni/hello-jni.o
echo [x86] "Compile++      ": "hello-jni <= native.cpp"
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang++ -MMD -MP -MF obj/local/x86/objs-debug/hello-jni/native.o.d -target i686-none-linux-android16 -fpic -O2 -Ijni -std=c++17 \
    -fno-exceptions -c  jni/native.cpp -o obj/local/x86/objs-debug/hello-jni/native.o
echo [x86] "Compile        ": "hello-jni <= atomic.S"
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang -MMD -MP -MF obj/local/x86/objs-debug/hello-jni/atomic.o.d -target i686-none-linux-android16 -fpic -Ijni -c  jni/atomic.S -o obj/local/x86/objs-debug/hello-jni/atomic.o
echo [x86] "SharedLibrary  ": "libhello-jni.so"
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/clang++ -Wl,-soname,libhello-jni.so -shared obj/local/x86/objs-debug/hello-jni/hello-jni.o obj/local/x86/objs-debug/hello-jni/native.o obj/local/x86/objs-debug/hello-jni/atomic.o obj/local/x86/libutil.a -lgcc -target i686-none-linux-android16 -no-canonical-prefixes -Wl,--no-undefined -llog -lc -lm -o obj/local/x86/libhello-jni.so
echo [x86] "Install        ": "libhello-jni.so => libs/x86/libhello-jni.so"
install -p obj/local/x86/libhello-jni.so ./libs/x86/libhello-jni.so
/opt/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/llvm-strip --strip-unneeded  ./libs/x86/libhello-jni.so
"#;

/// Two different C compilers feeding libraries of the same toolchain.
pub const AMBIGUOUS_C_COMPILERS: &str = "\
/ndk/gcc -c jni/a.c -o obj/local/x86/objs/a.o
/ndk/clang -c jni/b.c -o obj/local/x86/objs/b.o
/ndk/clang -shared -o obj/local/x86/liba.so obj/local/x86/objs/a.o obj/local/x86/objs/b.o
";

/// A GCC-era run: each ABI has its own prefixed compiler.
pub const LEGACY_GCC_TWO_ABIS: &str = "\
/ndk/arm-linux-androideabi-gcc -c jni/foo.c -o obj/local/armeabi-v7a/objs/foo/foo.o
/ndk/arm-linux-androideabi-gcc -shared -o obj/local/armeabi-v7a/libfoo.so obj/local/armeabi-v7a/objs/foo/foo.o
/ndk/i686-linux-android-gcc -c jni/foo.c -o obj/local/x86/objs/foo/foo.o
/ndk/i686-linux-android-gcc -shared -o obj/local/x86/libfoo.so obj/local/x86/objs/foo/foo.o
";

/// A `cmd.exe` transcript with caret continuation and quoted defines.
pub const NDK_BUILD_WINDOWS: &str = r#"if not exist "obj\local\x86_64\objs\native-lib" mkdir "obj\local\x86_64\objs\native-lib"
echo [x86_64] "Compile++      ": "native-lib <= native-lib.cpp"
C:\ndk\bin\clang++.exe -MMD -MP -MF obj\local\x86_64\objs\native-lib\native-lib.o.d -target x86_64-none-linux-android21 "-DGREETING=hi there" ^
 -fpic -c jni\native-lib.cpp -o obj\local\x86_64\objs\native-lib\native-lib.o
echo [x86_64] "SharedLibrary  ": "libnative-lib.so"
C:\ndk\bin\clang++.exe -shared -target x86_64-none-linux-android21 obj\local\x86_64\objs\native-lib\native-lib.o -llog -o obj\local\x86_64\libnative-lib.so
"#;

/// A transcript file and its `Android.mk` laid out in a project directory.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Transcript file path relative to the project root.
    pub transcript_path: PathBuf,
    pub transcript: String,
    /// `Android.mk` path relative to the project root.
    pub android_mk_path: PathBuf,
}

impl ProjectFixture {
    /// A project whose dry run printed `transcript`.
    pub fn new(transcript: impl Into<String>) -> Self {
        ProjectFixture {
            transcript_path: PathBuf::from("build/dry-run.txt"),
            transcript: transcript.into(),
            android_mk_path: PathBuf::from("jni/Android.mk"),
        }
    }

    /// The two-ABI `hello-jni` project.
    pub fn hello_jni() -> Self {
        Self::new(NDK_BUILD_TWO_ABIS)
    }

    /// Write the fixture under `root`.
    pub fn write_to(&self, root: &Path) -> std::io::Result<()> {
        for (path, content) in [
            (&self.transcript_path, self.transcript.as_str()),
            (&self.android_mk_path, "LOCAL_PATH := $(call my-dir)\n"),
        ] {
            let path = root.join(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        Ok(())
    }
}
